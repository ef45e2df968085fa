use clap::Parser;
use keyattest::attestation::decode_extension;
use keyattest::chain;
use keyattest::report::{format_attestation_debug, DebugTree};
use keyattest::store::{RevocationMap, TrustAnchorSet, TrustSnapshot};
use keyattest::{Config, ConfigArgs, VerificationOutcome, Verifier};
use std::error::Error;
use std::fs;

#[derive(Parser)]
enum KeyattestCli {
    Verify(VerifyArgs),
    Decode(DecodeArgs),
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Verify the supplied attestation certificate chain against the \
    given root certificates and status list, then appraise its key \
    description")]
struct VerifyArgs {
    #[arg(short, long, default_value = "chain.txt")]
    chain: String,

    #[arg(short, long, default_value = "roots.pem")]
    roots: String,

    #[arg(short, long, default_value = "status.json")]
    status: String,

    /// PEM public keys accepted as chain roots
    #[arg(short, long)]
    fallback_keys: Option<String>,

    /// JSON settings, overridden by the options below
    #[arg(long)]
    config: Option<String>,

    #[command(flatten)]
    settings: ConfigArgs,
}

#[derive(Debug, clap::Args)]
#[command(author, version, long_about = None,
    about = "Print the key description found in the supplied attestation \
    certificate chain, without verifying it")]
struct DecodeArgs {
    #[arg(short, long, default_value = "chain.txt")]
    chain: String,
}

fn main() {
    {
        use tracing_subscriber::{fmt, EnvFilter};
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    }

    match KeyattestCli::parse() {
        KeyattestCli::Verify(args) => match verify(&args) {
            Ok(o) if o.success => println!("verification successful"),
            Ok(o) => eprintln!("verification failed: {}", o.reasons.join("; ")),
            Err(e) => eprintln!("verification failed: {e}"),
        },

        KeyattestCli::Decode(args) => match decode(&args) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("decoding failed: {e}"),
        },
    }
}

fn config(args: &VerifyArgs) -> Result<Config, Box<dyn Error>> {
    let base = match &args.config {
        Some(path) => Config::load_json(&fs::read_to_string(path)?)?,
        None => Config::default(),
    };

    Ok(args.settings.apply(base))
}

fn snapshot(args: &VerifyArgs) -> Result<TrustSnapshot, Box<dyn Error>> {
    let mut anchors = TrustAnchorSet::load(&fs::read_to_string(&args.roots)?)?;

    if let Some(path) = &args.fallback_keys {
        anchors.load_fallback_keys(&fs::read_to_string(path)?)?;
    }

    let revocations = RevocationMap::load_json(&fs::read_to_string(&args.status)?)?;

    Ok(TrustSnapshot::new(anchors, Some(revocations)))
}

fn verify(args: &VerifyArgs) -> Result<VerificationOutcome, Box<dyn Error>> {
    let config = config(args)?;
    let debug = config.debug_attestation;
    let verifier = Verifier::new(config);
    let snapshot = snapshot(args)?;
    let payload = fs::read_to_string(&args.chain)?;

    let o = verifier.verify(&snapshot, Some(payload.trim()), debug);

    println!("{}", serde_json::to_string_pretty(&o.response)?);
    println!("{}", serde_json::to_string_pretty(&o)?);

    if o.debug.is_some() {
        println!("{}", format_attestation_debug(o.debug.as_ref()));
    }

    Ok(o)
}

fn decode(args: &DecodeArgs) -> Result<String, Box<dyn Error>> {
    let payload = fs::read_to_string(&args.chain)?;
    let chain = chain::parse(Some(payload.trim()))?;

    let tree = chain
        .entries()
        .iter()
        .find_map(|e| decode_extension(&e.der))
        .map(|kd| DebugTree::new(&kd));

    Ok(format_attestation_debug(tree.as_ref()))
}
