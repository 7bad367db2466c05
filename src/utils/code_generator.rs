use rand::Rng;

const REDEMPTION_CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const REDEMPTION_CODE_LEN: usize = 10;

/// 生成核销码（去掉易混淆字符，便于商户手动输入或二维码展示）
pub fn generate_redemption_code() -> String {
    let mut rng = rand::thread_rng();
    (0..REDEMPTION_CODE_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..REDEMPTION_CODE_CHARSET.len());
            REDEMPTION_CODE_CHARSET[idx] as char
        })
        .collect()
}
