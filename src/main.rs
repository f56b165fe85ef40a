mod cli;

#[tokio::main]
async fn main() {
    propdesk::logging::init();

    let code = match cli::run() {
        cli::RunOutcome::Serve { addr, config } => match propdesk::serve(addr, config).await {
            Ok(()) => 0,
            Err(err) => {
                tracing::error!(error = %err, %addr, "server error");
                1
            }
        },
        cli::RunOutcome::Session(config) => match propdesk::session::run(*config).await {
            Ok(()) => 0,
            Err(err) => {
                tracing::error!(error = %err, "session failed");
                1
            }
        },
        cli::RunOutcome::Exit(code) => code,
    };
    std::process::exit(code);
}
