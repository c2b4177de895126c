#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    cef_wifi_report_server::run().await?;
    Ok(())
}
