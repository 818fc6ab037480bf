use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use classroom_backend::{
    AppState,
    config::Config,
    middleware::{
        CooldownGate, RateLimiter, auth_middleware, auto_logout, cooldown, log_errors, rate_limit,
    },
    routes,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    // 设置 Redis 客户端
    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
    let redis_arc = Arc::new(redis_client);

    // 设置应用状态
    let state = AppState {
        pool,
        config: config.clone(),
        redis: redis_arc.clone(),
    };

    // 设置限流器与冷却闸
    let rate_limiter = Arc::new(RateLimiter::new(redis_arc.clone(), config.clone()));
    let cooldown_gate = Arc::new(CooldownGate::new(redis_arc.clone(), config.clone()));

    // 公开路由
    let public_routes = Router::new()
        .route("/auth/login", post(routes::auth::login))
        // OTP 发送路径额外套冷却闸
        .route(
            "/auth/send_otp",
            post(routes::auth::send_otp).route_layer(axum::middleware::from_fn_with_state(
                cooldown_gate.clone(),
                cooldown,
            )),
        )
        .route("/auth/verify_otp", post(routes::auth::verify_otp));

    // 需要认证的路由
    let protected_routes = Router::new()
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/send_confirmation", post(routes::auth::send_confirmation))
        .route("/auth/session/remaining", get(routes::auth::session_remaining))
        .route("/auth/session/extend", post(routes::auth::session_extend))
        // 仪表盘路由
        .route("/dashboard/home", get(routes::dashboard::home))
        .route("/dashboard/courses/{course_id}", get(routes::dashboard::course_detail))
        .route("/dashboard/assignments", get(routes::assignment::list_assignments))
        .route(
            "/dashboard/assignments/submit",
            post(routes::assignment::submit_assignment),
        )
        // 工单路由
        .route("/dashboard/tickets", get(routes::ticket::list_tickets))
        .route("/dashboard/tickets/submit", post(routes::ticket::submit_ticket))
        // 通知路由
        .route(
            "/dashboard/notifications",
            get(routes::notification::list_notifications),
        )
        .route(
            "/dashboard/notifications/mark-read",
            post(routes::notification::mark_read),
        )
        .route(
            "/dashboard/notifications/mark-all-read",
            post(routes::notification::mark_all_read),
        )
        // 自动登出检查在认证中间件之后执行
        .layer(axum::middleware::from_fn_with_state(state.clone(), auto_logout))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // 创建基础路由
    let router = Router::new().nest(
        &config.api_base_uri.clone(),
        Router::new().merge(public_routes).merge(protected_routes),
    );

    // 添加日志中间件和限流中间件（限流最外层，先于一切执行）
    let router = router.layer(axum::middleware::from_fn(log_errors)).layer(
        axum::middleware::from_fn_with_state(rate_limiter, rate_limit),
    );

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        let cors = CorsLayer::permissive();
        router.layer(cors)
    };

    // 添加应用状态
    let app = router.with_state(state.clone());

    // 启动服务器
    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
