use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tams::cli::run().await
}
