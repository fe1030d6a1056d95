use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    cli::run_cli(arcana_session_migration::Migrator).await;
}
