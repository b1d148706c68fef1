//! Binary entrypoint for the Vidshelf CLI.

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let code = vidshelf_cli::run().await;
    if code != 0 {
        std::process::exit(code);
    }
}
