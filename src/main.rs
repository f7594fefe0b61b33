use clap::Parser;

/// Dev helper binary: serves the toolbar config discovery endpoint so the
/// templating framework's dev toolbar can locate the running catalog server.
#[derive(Parser)]
#[command(name = "storycanvas", version, about)]
struct Cli {
    /// Port the catalog server is running on
    #[arg(long, default_value_t = 6006)]
    port: u16,

    /// Host the catalog server is running on
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Address to bind the config endpoint to
    #[arg(long, default_value = "127.0.0.1:0")]
    bind: String,
}

#[cfg(feature = "toolbar")]
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = storycanvas::toolbar::ToolbarConfig {
        port: cli.port,
        host: cli.host,
    };
    let endpoint = storycanvas::toolbar::serve_config(&cli.bind, config)?;
    println!(
        "storycanvas: config endpoint on http://{}{}",
        endpoint.addr(),
        storycanvas::toolbar::CONFIG_ENDPOINT
    );

    // Serve until interrupted
    loop {
        std::thread::park();
    }
}

#[cfg(not(feature = "toolbar"))]
fn main() {
    let _ = Cli::parse();
    eprintln!("storycanvas: rebuild with the `toolbar` feature to serve the config endpoint");
}
