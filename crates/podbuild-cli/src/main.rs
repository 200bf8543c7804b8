mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::fetch::FetchArgs;
use commands::generate::GenerateRequest;
use podbuild_store::install_signal_handler;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "podbuild",
    version,
    about = "Translate CocoaPods podspecs into Bazel BUILD files"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate BUILD.bazel next to a podspec.
    Generate {
        /// Path to a `.podspec.json` (or a Ruby `.podspec`, evaluated with `pod ipc spec`).
        podspec: PathBuf,
        /// Pod directory relative to the workspace root.
        #[arg(long)]
        path: Option<String>,
        /// Extra attribute values, e.g. `Foo_Core.copts += -DFOO`.
        #[arg(long = "user-option", value_name = "OPT", allow_hyphen_values = true)]
        user_options: Vec<String>,
        /// Compiler flag added to every library.
        #[arg(long = "copt", value_name = "FLAG", allow_hyphen_values = true)]
        copts: Vec<String>,
        /// Set `enable_modules = True` on every library.
        #[arg(long, default_value_t = false)]
        enable_modules: bool,
        /// Stage public headers under pod_support/Headers/Public.
        #[arg(long, default_value_t = false)]
        stage_headers: bool,
        /// Print the BUILD file instead of writing it.
        #[arg(long, default_value_t = false)]
        stdout: bool,
        /// Also write a BUILD file of aliases into this directory.
        #[arg(long, value_name = "DIR")]
        reexport_to: Option<PathBuf>,
    },
    /// Download a source archive into the cache and copy it into a directory.
    Fetch {
        /// Archive URL (http, https or file).
        #[arg(long)]
        url: String,
        /// Expected blake3 of the archive.
        #[arg(long)]
        checksum: Option<String>,
        /// Copy only this directory of the archive.
        #[arg(long)]
        sub_dir: Option<String>,
        /// Destination directory; replaced if it exists.
        #[arg(long)]
        into: PathBuf,
        /// Cache directory (default: $PODBUILD_CACHE_DIR or ~/.cache/podbuild).
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        /// Fail instead of downloading when the archive is not cached.
        #[arg(long, default_value_t = false)]
        offline: bool,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("PODBUILD_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    install_signal_handler();

    let json_output = cli.json;
    let result = match cli.command {
        Commands::Generate {
            podspec,
            path,
            user_options,
            copts,
            enable_modules,
            stage_headers,
            stdout,
            reexport_to,
        } => commands::generate::run(
            &GenerateRequest {
                podspec,
                path,
                user_options,
                copts,
                enable_modules,
                stage_headers,
                stdout,
                reexport_to,
            },
            json_output,
        ),
        Commands::Fetch {
            url,
            checksum,
            sub_dir,
            into,
            cache_dir,
            offline,
        } => commands::fetch::run(
            &FetchArgs {
                url,
                checksum,
                sub_dir,
                into,
                cache_dir,
                offline,
            },
            json_output,
        ),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(commands::exit_code_for(&msg))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copt_accepts_flag_values() {
        let cli = Cli::try_parse_from([
            "podbuild",
            "generate",
            "--copt",
            "-DFOO",
            "--copt",
            "-Wno-error",
            "--user-option",
            "Foo.copts += -DBAR",
            "Foo.podspec.json",
        ])
        .unwrap();
        let Commands::Generate {
            copts,
            user_options,
            podspec,
            ..
        } = cli.command
        else {
            panic!("expected generate");
        };
        assert_eq!(copts, ["-DFOO", "-Wno-error"]);
        assert_eq!(user_options, ["Foo.copts += -DBAR"]);
        assert_eq!(podspec, PathBuf::from("Foo.podspec.json"));
    }
}
