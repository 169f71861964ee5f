use std::net::TcpListener;

use actix_web::dev::Server;
use actix_web::web;
use actix_web::web::Data;
use actix_web::App;
use actix_web::HttpServer;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_actix_web::TracingLogger;

use crate::configuration::DatabaseSettings;
use crate::configuration::Settings;
use crate::mailchimp_client::MailchimpClient;
use crate::member_locks::MemberLocks;
use crate::routes::create_member;
use crate::routes::health_check;
use crate::routes::remove_member;
use crate::routes::show_member;
use crate::routes::update_member;

/// Wrapper for actix's `Server` with access to the bound port. Not to be
/// confused with actix's `App`!
pub struct Application {
    /// Left private; use `get_port` to access
    port: u16,
    server: Server,
}

impl Application {
    /// Bind the listener, build the db pool and MailChimp client, and wire
    /// up the server.
    pub async fn build(cfg: Settings) -> Result<Self, anyhow::Error> {
        let addr = format!("{}:{}", cfg.application.host, cfg.application.port);
        let listener = TcpListener::bind(addr)?;

        // get the port assigned by the OS (the config may ask for port 0)
        let port = listener.local_addr()?.port();

        // connect_lazy only connects when the pool is first used; db-free
        // requests (e.g. health_check) never touch it
        let pool = get_connection_pool(&cfg.database);
        let mailchimp = cfg.mailchimp.client()?;

        let server = run(listener, pool, mailchimp)?;

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 { self.port }

    /// Because this consumes `self`, this should be the final function call
    /// (or passed to `tokio::spawn`)
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> { self.server.await }
}

pub fn get_connection_pool(db_cfg: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new().connect_lazy_with(db_cfg.connection())
}

/// Declares all API endpoints. The server is not responsible for binding to
/// an address, it only listens to an already bound one.
pub fn run(
    listener: TcpListener,
    pool: PgPool,
    mailchimp: MailchimpClient,
) -> Result<Server, anyhow::Error> {
    // `Data` is externally an `Arc`; each worker's `App` clones a handle to
    // the same pool, client, and lock registry
    let pool = Data::new(pool);
    let mailchimp = Data::new(mailchimp);
    let member_locks = Data::new(MemberLocks::default());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default()) // wrap the whole app in tracing middleware
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/members")
                    .route("", web::post().to(create_member))
                    .route("/{member_id}", web::get().to(show_member))
                    .route("/{member_id}", web::put().to(update_member))
                    .route("/{member_id}", web::delete().to(remove_member)),
            )
            .app_data(pool.clone())
            .app_data(mailchimp.clone())
            .app_data(member_locks.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
