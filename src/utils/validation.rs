use crate::error::{AppError, AppResult};

pub fn validate_price(price: i64) -> AppResult<()> {
    if price <= 0 {
        return Err(AppError::InvalidPrice(format!(
            "price must be positive, got {price}"
        )));
    }
    Ok(())
}

pub fn validate_percentage(value: u8) -> AppResult<()> {
    if value > 100 {
        return Err(AppError::ValidationError(format!(
            "percentage must be within 0..=100, got {value}"
        )));
    }
    Ok(())
}

/// 用户 ID 为钱包地址或会话标识，仅做非空校验
pub fn validate_user_id(user_id: &str) -> AppResult<()> {
    if user_id.trim().is_empty() {
        return Err(AppError::ValidationError("user id must not be empty".into()));
    }
    Ok(())
}

/// 按百分比折扣计算成交价，向下取整到分
pub fn apply_discount(price: i64, discount_percentage: u8) -> i64 {
    price - price * i64::from(discount_percentage) / 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_price() {
        assert!(validate_price(1).is_ok());
        assert!(matches!(validate_price(0), Err(AppError::InvalidPrice(_))));
        assert!(matches!(validate_price(-5), Err(AppError::InvalidPrice(_))));
    }

    #[test]
    fn test_validate_percentage() {
        assert!(validate_percentage(0).is_ok());
        assert!(validate_percentage(100).is_ok());
        assert!(validate_percentage(101).is_err());
    }

    #[test]
    fn test_apply_discount() {
        assert_eq!(apply_discount(1000, 20), 800);
        assert_eq!(apply_discount(999, 10), 900);
        assert_eq!(apply_discount(1000, 0), 1000);
    }
}
