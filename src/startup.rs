use std::net::TcpListener;

use actix_web::dev::Server;
use actix_web::web::{self, Data};
use actix_web::{App, HttpServer};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing_actix_web::TracingLogger;

use crate::configuration::{DatabaseSettings, Settings};
use crate::email_client::EmailClient;
use crate::routes::{
    ContactRecipient, contact, create_event, create_registration, create_subscriber,
    delete_event, delete_registration, delete_subscriber, health_check, json_error_handler,
    list_events, list_registrations, list_subscribers, partial_update_event,
    partial_update_registration, partial_update_subscriber, query_error_handler, retrieve_event,
    retrieve_registration, retrieve_subscriber, update_event, update_registration,
    update_subscriber,
};

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(configuration: Settings) -> Result<Self, anyhow::Error> {
        let connection_pool = get_connection_pool(&configuration.database);
        let email_client = configuration.email_client.client()?;
        let contact_recipient = configuration
            .email_client
            .contact_recipient()
            .map_err(anyhow::Error::msg)?;

        let address = format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        );
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();
        let server = run(
            listener,
            connection_pool,
            email_client,
            ContactRecipient(contact_recipient),
        )?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn get_connection_pool(configuration: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(configuration.with_db())
}

pub fn run(
    listener: TcpListener,
    db_pool: PgPool,
    email_client: EmailClient,
    contact_recipient: ContactRecipient,
) -> Result<Server, std::io::Error> {
    let db_pool = Data::new(db_pool);
    let email_client = Data::new(email_client);
    let contact_recipient = Data::new(contact_recipient);
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::QueryConfig::default().error_handler(query_error_handler))
            .route("/health_check", web::get().to(health_check))
            .route("/contact/", web::post().to(contact))
            .service(
                web::resource("/events/")
                    .route(web::get().to(list_events))
                    .route(web::post().to(create_event)),
            )
            .service(
                web::resource("/events/{id}/")
                    .route(web::get().to(retrieve_event))
                    .route(web::put().to(update_event))
                    .route(web::patch().to(partial_update_event))
                    .route(web::delete().to(delete_event)),
            )
            .service(
                web::resource("/registrations/")
                    .route(web::get().to(list_registrations))
                    .route(web::post().to(create_registration)),
            )
            .service(
                web::resource("/registrations/{id}/")
                    .route(web::get().to(retrieve_registration))
                    .route(web::put().to(update_registration))
                    .route(web::patch().to(partial_update_registration))
                    .route(web::delete().to(delete_registration)),
            )
            .service(
                web::resource("/subscribers/")
                    .route(web::get().to(list_subscribers))
                    .route(web::post().to(create_subscriber)),
            )
            .service(
                web::resource("/subscribers/{id}/")
                    .route(web::get().to(retrieve_subscriber))
                    .route(web::put().to(update_subscriber))
                    .route(web::patch().to(partial_update_subscriber))
                    .route(web::delete().to(delete_subscriber)),
            )
            .app_data(db_pool.clone())
            .app_data(email_client.clone())
            .app_data(contact_recipient.clone())
    })
    .listen(listener)?
    .run();
    Ok(server)
}
