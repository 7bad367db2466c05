use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::Context;
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use agora_deals_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{RewardDispatcher, RewardPublisher, SettlementClient},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::Services,
    swagger::swagger_config,
    tasks,
    utils::{JwtService, SharedClock, SystemClock},
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("Failed to load configuration")?;

    // 初始化数据库连接并执行迁移
    let pool = create_pool(&config.database)
        .await
        .context("Failed to connect to database")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    let clock: SharedClock = Arc::new(SystemClock);

    // JWT 只做校验，签发在外部身份服务
    let jwt_service = JwtService::new(&config.jwt.secret, config.jwt.access_token_expires_in);

    // 外部协作方
    let settlement = SettlementClient::new(config.settlement.clone())?;
    if !settlement.is_enabled() {
        log::warn!("Settlement gateway not configured, purchases are approved offline");
    }
    let (rewards, rewards_rx) = RewardPublisher::channel();
    tokio::spawn(RewardDispatcher::new(config.rewards.clone()).run(rewards_rx));

    let services = Services::new(&config, pool, clock.clone(), rewards, settlement);

    // 启动后台定时任务
    tasks::spawn_all(services.clone(), clock, &config.tasks);

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .configure(|cfg| handlers::register_services(cfg, &services))
            .app_data(web::JsonConfig::default().limit(64 * 1024))
            .configure(swagger_config)
            .configure(handlers::health_config)
            .configure(handlers::api_config)
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    Ok(())
}
