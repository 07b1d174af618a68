#[tokio::main]
async fn main() -> anyhow::Result<()> {
    eyecare_lib::run().await
}
