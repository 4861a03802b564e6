//! bmi-client: asks for sex, age, height and mass, sends them to a BMI
//! server and prints the result. One request per invocation.

use bmi_server::client::{Client, ClientError};
use bmi_server::protocol::{Request, Response};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bmi-client")]
#[command(version = "0.1.0")]
#[command(about = "Send one BMI request to a bmi-server", long_about = None)]
struct Args {
    /// Server address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    server: String,

    /// Seconds to wait on each network step (0 = no limit)
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn prompt(input: &mut impl BufRead, label: &str) -> io::Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let mut input = io::stdin().lock();
    let sex = prompt(&mut input, "Sexo (M/F/O)")?;
    let age = prompt(&mut input, "Edad (años)")?;
    let height = prompt(&mut input, "Altura en metros (ej. 1.75)")?;
    let mass = prompt(&mut input, "Peso en kg (ej. 68.5)")?;
    drop(input);

    let timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));
    let client = Client::new(args.server, timeout);
    println!("[i] Conectando a {} ...", client.addr());

    match client
        .send(&Request::from_text(&sex, &age, &height, &mass))
        .await
    {
        Ok(Response::Error { error }) => println!("Error del servidor: {error}"),
        Ok(Response::Success(report)) => {
            println!("\n--- Resultado IMC ---");
            println!("IMC: {}", report.bmi);
            println!("Categoría: {}", report.category);
            println!("{}", report.message);
            println!("---------------------\n");
        }
        Err(ClientError::NoResponse) => println!("[-] No se recibió respuesta del servidor."),
        Err(e) if e.is_refused() => eprintln!(
            "[-] No se pudo conectar al servidor. Verifica IP/puerto y que el servidor esté corriendo."
        ),
        Err(e) => eprintln!("[!] Error de cliente: {e}"),
    }

    Ok(())
}
