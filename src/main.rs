use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use yaolist_storage::config;
use yaolist_storage::storage::StorageAttributes;
use yaolist_storage::{FilesystemManager, NamingRule, UploadedFile, WriteOptions};

/// yaolist-storage - config-driven storage disks (local, Aliyun OSS, Qiniu Kodo)
#[derive(Parser)]
#[command(name = "yaolist-storage")]
#[command(version, about = "Config-driven storage disks", long_about = None)]
struct Cli {
    /// Configuration file (created with defaults if missing)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured disks
    Disks,

    /// Store a local file on a disk
    Put {
        disk: String,
        file: PathBuf,

        /// Target directory on the disk
        #[arg(short, long, default_value = "")]
        dir: String,

        /// Explicit object name (skips the naming rule)
        #[arg(short, long)]
        name: Option<String>,

        /// Naming rule: date, md5 or sha1
        #[arg(short, long, default_value = "date")]
        rule: String,
    },

    /// Print the public URL of a path
    Url { disk: String, path: String },

    /// Print the fully qualified path
    Path { disk: String, path: String },

    /// List a directory
    Ls {
        disk: String,
        #[arg(default_value = "")]
        path: String,

        /// Recurse into subdirectories
        #[arg(long)]
        deep: bool,
    },

    /// Write a file's contents to stdout
    Cat { disk: String, path: String },

    /// Delete a file
    Rm { disk: String, path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yaolist_storage=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("yaolist-storage built at {}", env!("BUILD_TIME"));

    let cli = Cli::parse();

    // Load configuration / 加载配置
    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let repository = config::load_config(&config_path).map_err(|e| anyhow!(e))?;
    let mut manager = FilesystemManager::new(repository);

    match cli.command {
        Commands::Disks => {
            let default = manager.get_default_driver();
            let disks = manager
                .get_config(Some("disks"), None)
                .and_then(|v| v.as_object().cloned())
                .unwrap_or_default();
            for name in disks.keys() {
                let driver_type = manager.resolve_type(name)?;
                let marker = if default.as_deref() == Some(name.as_str()) { "*" } else { " " };
                println!("{} {}\t{}", marker, name, driver_type);
            }
        }
        Commands::Put {
            disk,
            file,
            dir,
            name,
            rule,
        } => {
            let driver = manager.disk(Some(disk.as_str()))?;
            let upload = UploadedFile::new(&file);
            let options = WriteOptions::default();

            let stored = match name {
                Some(name) => driver.put_file_as(&dir, &upload, &name, &options).await?,
                None => {
                    let rule: NamingRule = rule.parse().map_err(|e: String| anyhow!(e))?;
                    driver.put_file(&dir, &upload, Some(&rule), &options).await?
                }
            };

            match stored {
                Some(path) => {
                    tracing::info!("Stored {:?} on [{}] as {}", file, disk, path);
                    println!("{}", path);
                }
                None => return Err(anyhow!("failed to store {:?} on disk [{}]", file, disk)),
            }
        }
        Commands::Url { disk, path } => {
            println!("{}", manager.disk(Some(disk.as_str()))?.url(&path)?);
        }
        Commands::Path { disk, path } => {
            println!("{}", manager.disk(Some(disk.as_str()))?.path(&path));
        }
        Commands::Ls { disk, path, deep } => {
            let driver = manager.disk(Some(disk.as_str()))?;
            for entry in driver.list_contents(&path, deep).await? {
                match entry {
                    StorageAttributes::Dir(d) => println!("{}/", d.path),
                    StorageAttributes::File(f) => {
                        println!("{}\t{}", f.path, f.file_size.unwrap_or_default())
                    }
                }
            }
        }
        Commands::Cat { disk, path } => {
            let data = manager.disk(Some(disk.as_str()))?.read(&path).await?;
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&data).await?;
            stdout.flush().await?;
        }
        Commands::Rm { disk, path } => {
            manager.disk(Some(disk.as_str()))?.delete(&path).await?;
            tracing::info!("Deleted {} from [{}]", path, disk);
        }
    }

    Ok(())
}
