use event_desk::startup::Application;
use event_desk::{configuration::get_configuration, telemetry::*};

#[actix_web::main]
async fn main() -> Result<(), anyhow::Error> {
    let subscriber = get_subscriber("event_desk".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let configuration = get_configuration()?;
    Application::build(configuration)
        .await?
        .run_until_stopped()
        .await?;
    Ok(())
}
