//! Agora CLI Client
//!
//! Command-line interface for interacting with an Agora server.

use agora::network::Client;
use agora::protocol::{
    Annonce, AnnonceFromDomain, CreateAnnonce, Domain, NoParams, RemoveAnnonce,
    RequestUdpCoordinates, SignIn, SignInOk, SignUp, UdpCoordinatesOk, UdpServer,
    UpdateAnnonce,
};
use agora::session::ClientHandler;
use agora::{Config, ErrorLogMessage, Request, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// Agora CLI
#[derive(Parser, Debug)]
#[command(name = "agora-cli")]
#[command(about = "CLI for the Agora marketplace")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    server: String,

    /// RSA modulus size of the client keypair
    #[arg(long, default_value = "2048")]
    rsa_bits: usize,

    #[command(subcommand)]
    command: Commands,
}

/// Credentials of commands that sign in first
#[derive(clap::Args, Debug)]
struct Credentials {
    /// Account mail
    #[arg(long)]
    mail: String,

    /// Account password
    #[arg(long)]
    pwd: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an account
    SignUp { mail: String, name: String, pwd: String },

    /// List the marketplace domains
    Domains,

    /// List the annonces of a domain
    List { domain: String },

    /// Publish an annonce
    Create {
        #[command(flatten)]
        credentials: Credentials,
        domain: String,
        title: String,
        price: i64,
        #[arg(long, default_value = "")]
        descriptif: String,
    },

    /// Edit one of your annonces
    Update {
        #[command(flatten)]
        credentials: Credentials,
        id: i64,
        title: String,
        price: i64,
        #[arg(long, default_value = "")]
        descriptif: String,
    },

    /// Remove one of your annonces
    Remove {
        #[command(flatten)]
        credentials: Credentials,
        id: i64,
    },

    /// Publish where you can be reached over UDP
    RegisterUdp {
        #[command(flatten)]
        credentials: Credentials,
        address: String,
        port: u16,
    },

    /// Look up where another account can be reached over UDP
    LookupUdp {
        #[command(flatten)]
        credentials: Credentials,
        peer: String,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();
    let config = Config::builder().rsa_key_bits(args.rsa_bits).build();

    let mut console = Console::default();
    if let Err(e) = run(&args, &config, &mut console) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
    if console.failed {
        std::process::exit(2);
    }
}

fn run(args: &Args, config: &Config, console: &mut Console) -> Result<()> {
    let mut client = Client::connect(&args.server, config)?;

    let (credentials, request) = match &args.command {
        Commands::SignUp { mail, name, pwd } => (
            None,
            Request::SignUp(SignUp {
                mail: mail.clone(),
                name: name.clone(),
                pwd: pwd.clone(),
            }),
        ),
        Commands::Domains => (None, Request::DomainsList(NoParams {})),
        Commands::List { domain } => (
            None,
            Request::AnnonceFromDomain(AnnonceFromDomain {
                domain: Domain::new(domain.as_str()),
            }),
        ),
        Commands::Create {
            credentials,
            domain,
            title,
            price,
            descriptif,
        } => (
            Some(credentials),
            Request::CreateAnnonce(CreateAnnonce {
                domain: Domain::new(domain.as_str()),
                title: title.clone(),
                descriptif: descriptif.clone(),
                price: *price,
            }),
        ),
        Commands::Update {
            credentials,
            id,
            title,
            price,
            descriptif,
        } => (
            Some(credentials),
            Request::UpdateAnnonce(UpdateAnnonce {
                title: title.clone(),
                descriptif: descriptif.clone(),
                price: *price,
                id: *id,
            }),
        ),
        Commands::Remove { credentials, id } => (
            Some(credentials),
            Request::RemoveAnnonce(RemoveAnnonce { id: *id }),
        ),
        Commands::RegisterUdp {
            credentials,
            address,
            port,
        } => (
            Some(credentials),
            Request::UdpServer(UdpServer {
                address: address.clone(),
                port: *port,
            }),
        ),
        Commands::LookupUdp { credentials, peer } => (
            Some(credentials),
            Request::RequestUdpCoordinates(RequestUdpCoordinates { mail: peer.clone() }),
        ),
    };

    if let Some(credentials) = credentials {
        let sign_in = Request::SignIn(SignIn {
            mail: credentials.mail.clone(),
            pwd: credentials.pwd.clone(),
            send_domain_list: false,
        });
        client.call(sign_in, console)?;
        if console.failed {
            client.close();
            return Ok(());
        }
    }

    client.call(request, console)?;

    if credentials.is_some() {
        client.call(Request::SignOut(NoParams {}), console)?;
    }
    client.close();
    Ok(())
}

/// Prints responses to stdout, failures to stderr
#[derive(Default)]
struct Console {
    failed: bool,
}

impl Console {
    fn fail(&mut self, command: &str, error: ErrorLogMessage) {
        eprintln!("{} refused: {}", command, error);
        self.failed = true;
    }
}

impl ClientHandler for Console {
    fn sign_up_ok(&mut self) {
        println!("Account created");
    }

    fn sign_up_ko(&mut self, error: ErrorLogMessage) {
        self.fail("Sign up", error);
    }

    fn sign_in_ok(&mut self, answer: SignInOk) {
        tracing::info!("Signed in as {}", answer.name);
    }

    fn sign_in_ko(&mut self, error: ErrorLogMessage) {
        self.fail("Sign in", error);
    }

    fn domains_list_ok(&mut self, domains: Vec<Domain>) {
        for domain in domains {
            println!("{}", domain);
        }
    }

    fn create_annonce_ok(&mut self, id: i64) {
        println!("Annonce {} published", id);
    }

    fn create_annonce_ko(&mut self, error: ErrorLogMessage) {
        self.fail("Create", error);
    }

    fn update_annonce_ok(&mut self) {
        println!("Annonce updated");
    }

    fn update_annonce_ko(&mut self, error: ErrorLogMessage) {
        self.fail("Update", error);
    }

    fn remove_annonce_ok(&mut self) {
        println!("Annonce removed");
    }

    fn remove_annonce_ko(&mut self, error: ErrorLogMessage) {
        self.fail("Remove", error);
    }

    fn annonce_from_domain_ok(&mut self, annonces: Vec<Annonce>) {
        for annonce in annonces {
            println!(
                "#{} {} ({}) by {}: {}",
                annonce.id, annonce.title, annonce.price, annonce.owner, annonce.descriptif
            );
        }
    }

    fn annonce_from_domain_ko(&mut self, error: ErrorLogMessage) {
        self.fail("List", error);
    }

    fn udp_server_ok(&mut self) {
        println!("UDP coordinates registered");
    }

    fn udp_server_ko(&mut self, error: ErrorLogMessage) {
        self.fail("Register UDP", error);
    }

    fn request_udp_coordinates_ok(&mut self, answer: UdpCoordinatesOk) {
        println!("{} at {}:{}", answer.mail, answer.coord.addr, answer.coord.port);
    }

    fn request_udp_coordinates_ko(&mut self, error: ErrorLogMessage) {
        self.fail("Lookup UDP", error);
    }
}
