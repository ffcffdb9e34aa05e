//! The command line surface of simpleca.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::str::FromStr;

use clap::Parser;

use crate::commons::error::{CaIoError, Error};
use crate::commons::CaResult;
use crate::config::{self, Config};
use crate::constants::{CONFIG_FILE, SIMPLECA_APP, SIMPLECA_VERSION, STATE_FILE};
use crate::ops;
use crate::paths;
use crate::state::{Class, KeyType, State};

//------------ Options -------------------------------------------------------

/// The command line options for simpleca.
#[derive(clap::Parser)]
#[command(
    name = "simpleca",
    version,
    about = "A small personal certificate authority manager.",
)]
pub struct Options {
    #[command(subcommand)]
    pub command: Command,
}

impl Options {
    /// Creates the options from the process arguments.
    ///
    /// If the arguments won't result in usable options, exits the process.
    pub fn from_args() -> Self {
        Self::parse()
    }
}

//------------ Command -------------------------------------------------------

#[derive(clap::Subcommand)]
pub enum Command {
    /// Init the current folder as a simpleca repository.
    ///
    /// Creates the root/, intermediates/ and clients/ folders as well as
    /// an empty state file and a generic configuration file. You can run
    /// it multiple times, it won't overwrite or delete your content.
    Init(Init),

    /// Generate a key pair.
    Generate(Generate),

    /// Sign a public key, producing a certificate.
    Sign(Sign),

    /// Delete a key pair and all associated certificates.
    Rm(Rm),

    /// Print the version.
    Version(Version),
}

//------------ Init ----------------------------------------------------------

#[derive(clap::Parser)]
pub struct Init;

impl Init {
    pub fn run(self, dir: &Path) -> CaResult<String> {
        ops::init::init_repository(dir)?;
        Ok(
            "Folder initialized, please edit the configuration.json file to fit your organization"
                .to_string(),
        )
    }
}

//------------ Generate ------------------------------------------------------

#[derive(clap::Parser)]
pub struct Generate {
    /// The class of key to generate: root, intermediate or client.
    pub class: String,

    /// The key type.
    #[arg(long = "type", default_value = "ecdsa")]
    pub key_type: String,

    /// Bit length for rsa keys (1024, 2048 or 4096), curve size for
    /// ecdsa keys (224, 256, 384 or 521).
    #[arg(long)]
    pub size: Option<u32>,

    /// The key name. Defaults to the class name.
    #[arg(long)]
    pub name: Option<String>,

    /// Store the private key unencrypted.
    #[arg(long = "clear-text")]
    pub clear_text: bool,
}

impl Generate {
    pub fn run(self, dir: &Path, state: &mut State) -> CaResult<String> {
        let class = Class::from_str(&self.class)?;
        let key_type = KeyType::from_str(&self.key_type)?;

        let passphrase = if self.clear_text {
            None
        } else {
            let name = ops::generate::resolve_name(class, self.name.as_deref());
            let priv_key_path = paths::priv_key_path(&paths::base_path(class, &name));
            Some(prompt_new_passphrase(&priv_key_path)?)
        };

        let generated = ops::generate::generate(
            dir,
            state,
            class,
            self.name.as_deref(),
            key_type,
            self.size,
            passphrase.as_deref(),
        )?;

        if generated.encrypted {
            Ok(format!("Encrypted key generated in {}", generated.priv_key_path.display()))
        } else {
            Ok(format!("Key generated in {}", generated.priv_key_path.display()))
        }
    }
}

//------------ Sign ----------------------------------------------------------

#[derive(clap::Parser)]
pub struct Sign {
    /// The class of key to sign: root, intermediate or client.
    pub class: String,

    /// The key name. Defaults to the class name.
    #[arg(long)]
    pub name: Option<String>,

    /// Sign the key with the given CA: the name of an intermediate CA,
    /// or "root" if you want to sign an intermediate CA. Self-signs when
    /// absent.
    #[arg(long)]
    pub with: Option<String>,

    /// Subject alternative name (DNS name or IP address) to attach to a
    /// client certificate. May be repeated.
    #[arg(long = "altname")]
    pub alt_names: Vec<String>,
}

impl Sign {
    pub fn run(self, dir: &Path, state: &mut State, config: &Config) -> CaResult<String> {
        let class = Class::from_str(&self.class)?;

        let issued = ops::sign::sign(
            dir,
            state,
            config,
            class,
            self.name.as_deref(),
            self.with.as_deref(),
            &self.alt_names,
        )?;

        let mut msg = format!("Certificate generated in {}", issued.cert_path.display());
        if let Some(full_chain_path) = &issued.full_chain_path {
            msg.push_str(&format!(
                "\nFull certificate chain generated in {}",
                full_chain_path.display()
            ));
        }
        Ok(msg)
    }
}

//------------ Rm ------------------------------------------------------------

#[derive(clap::Parser)]
pub struct Rm {
    /// The class of key to delete: intermediate or client.
    pub class: String,

    /// The key name. Defaults to the class name.
    #[arg(long)]
    pub name: Option<String>,
}

impl Rm {
    pub fn run(self, dir: &Path, state: &mut State) -> CaResult<String> {
        let class = Class::from_str(&self.class)?;

        if class == Class::Intermediate {
            confirm(
                "Warning! You are about to delete an intermediate key and certificate, \
                 are you sure you want to do that (y/N)? ",
            )?;
        }

        ops::rm::remove(dir, state, class, self.name.as_deref())?;

        Ok(format!("{} keys and certificates deleted", class))
    }
}

//------------ Version -------------------------------------------------------

#[derive(clap::Parser)]
pub struct Version;

impl Version {
    pub fn run(self) -> String {
        format!("{} v{}", SIMPLECA_APP, SIMPLECA_VERSION)
    }
}

//------------ Entry point ---------------------------------------------------

/// Parses the arguments and runs the requested action.
///
/// Everything except init, version and help requires an initialized
/// repository; for those actions the state file is loaded up front and
/// only written back after the action fully succeeded.
pub fn run() -> CaResult<String> {
    config::init_logging()?;

    let options = Options::from_args();
    let dir = Path::new(".");

    match options.command {
        Command::Init(cmd) => cmd.run(dir),
        Command::Version(cmd) => Ok(cmd.run()),
        Command::Generate(cmd) => with_repo(dir, |state, _| cmd.run(dir, state)),
        Command::Sign(cmd) => with_repo(dir, |state, config| cmd.run(dir, state, config)),
        Command::Rm(cmd) => with_repo(dir, |state, _| cmd.run(dir, state)),
    }
}

fn with_repo<F>(dir: &Path, op: F) -> CaResult<String>
where
    F: FnOnce(&mut State, &Config) -> CaResult<String>,
{
    if !ops::init::is_repo(dir) {
        return Err(Error::NotARepository);
    }

    let state_path = dir.join(STATE_FILE);
    let mut state = State::load(&state_path)?;
    let config = Config::load(&dir.join(CONFIG_FILE))?;

    let msg = op(&mut state, &config)?;

    // only a fully successful action reaches the state file
    state.touch();
    state.save(&state_path)?;

    Ok(msg)
}

//------------ Interactive prompts -------------------------------------------

/// Collects a new passphrase, asking twice until both entries match.
///
/// An empty passphrase is accepted; the private key is then encrypted
/// with an empty string rather than stored in the clear.
fn prompt_new_passphrase(priv_key_path: &Path) -> CaResult<String> {
    loop {
        let passphrase = rpassword::prompt_password(format!(
            "Please provide the password for the file {}: ",
            priv_key_path.display()
        ))
        .map_err(|e| CaIoError::new("could not read passphrase", e))?;

        let check = rpassword::prompt_password("Please repeat it: ")
            .map_err(|e| CaIoError::new("could not read passphrase", e))?;

        if passphrase == check {
            return Ok(passphrase);
        }
        println!("Passwords don't match");
    }
}

fn confirm(prompt: &str) -> CaResult<()> {
    print!("{}", prompt);
    io::stdout()
        .flush()
        .map_err(|e| CaIoError::new("could not write prompt", e))?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(|e| CaIoError::new("could not read answer", e))?;

    match answer.trim() {
        "y" | "Y" | "yes" => Ok(()),
        _ => Err(Error::Aborted),
    }
}
