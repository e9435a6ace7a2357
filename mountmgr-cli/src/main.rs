//! Mount manager CLI - inspect and change drive letter mappings of a prefix.
//!
//! Usage:
//!   mountmgr [--prefix DIR] [--json] <command>
//!
//! Examples:
//!   mountmgr list                                   # Drives found in the prefix
//!   mountmgr attach usb-1 /dev/sdb1 --mount /media/usb
//!   mountmgr query '\??\C:' geometry                # Synthetic disk geometry
//!   mountmgr session                                # Read commands from stdin

use std::path::{Path, PathBuf};
use std::sync::mpsc;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc as tokio_mpsc, oneshot};

use mountmgr_core::{
    ChannelNotifier, DeviceNumber, DiskGeometry, DriveError, DriveType, IoControl,
    JsonDriveTypeStore, MountManager, MountManagerConfig, UnixDosDevices, VolumeChange,
};

type Manager = MountManager<UnixDosDevices, JsonDriveTypeStore, ChannelNotifier>;

/// Drive letter manager CLI
#[derive(Parser, Debug)]
#[command(name = "mountmgr")]
#[command(about = "Manage DOS drive letters of a prefix")]
struct Args {
    /// Prefix directory (defaults to $MOUNTMGR_PREFIX or ~/.mountmgr)
    #[arg(long)]
    prefix: Option<PathBuf>,

    /// JSON config file with a "prefix" entry
    #[arg(long, conflicts_with = "prefix")]
    config: Option<PathBuf>,

    /// Enable trace logging
    #[arg(short, long)]
    trace: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List drives found in the prefix
    List,
    /// Map a device to a drive letter
    Attach {
        udi: String,
        device: PathBuf,
        /// Unix mount point of the filesystem on the device
        #[arg(long)]
        mount: Option<PathBuf>,
        /// floppy, hd, network, cdrom, ramdisk (or removable, fixed, remote)
        #[arg(long = "type", default_value = "fixed")]
        drive_type: DriveType,
    },
    /// Send a device control request to a device or link name
    Query {
        name: String,
        /// geometry, devnum, toc, or a numeric code
        request: String,
        /// Output buffer length
        #[arg(long, default_value_t = 64)]
        len: usize,
    },
    /// Keep the manager alive and read commands from stdin
    Session,
}

/// Parse a query request name or numeric ioctl code.
fn parse_request(request: &str) -> Result<u32, String> {
    match request.to_ascii_lowercase().as_str() {
        "geometry" => Ok(IoControl::GetDriveGeometry.into()),
        "devnum" => Ok(IoControl::GetDeviceNumber.into()),
        "toc" => Ok(IoControl::ReadToc.into()),
        other => {
            let parsed = match other.strip_prefix("0x") {
                Some(hex) => u32::from_str_radix(hex, 16),
                None => other.parse(),
            };
            parsed.map_err(|_| format!("unknown request: {}", request))
        }
    }
}

fn list_drives(mgr: &Manager, as_json: bool) -> String {
    let drives: Vec<Value> = mgr
        .drives()
        .iter()
        .map(|(_, d)| {
            json!({
                "letter": d.letter().map(|l| l.to_string()),
                "type": d.drive_type(),
                "device": d.name(),
                "udi": d.udi(),
                "unixMount": d.unix_mount().map(|p| p.display().to_string()),
                "deviceNumber": d.device_number(),
            })
        })
        .collect();

    if as_json {
        return Value::Array(drives).to_string();
    }
    mgr.drives()
        .iter()
        .map(|(_, d)| {
            format!(
                "{:<3} {:<9} {:<26} {}",
                d.letter().map(|l| l.to_string()).unwrap_or_else(|| "-".into()),
                d.drive_type().to_string(),
                d.name(),
                d.unix_mount()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render an ioctl reply, decoding the payloads we know.
fn query(mgr: &Manager, name: &str, code: u32, len: usize, as_json: bool) -> String {
    match mgr.ioctl(name, code, len) {
        Ok(out) => {
            let decoded = match IoControl::try_from(code) {
                Ok(IoControl::GetDriveGeometry) if out.len() == DiskGeometry::SIZE => Some(json!({
                    "cylinders": i64::from_le_bytes(out[0..8].try_into().unwrap_or_default()),
                    "mediaType": le_u32(&out, 8),
                    "tracksPerCylinder": le_u32(&out, 12),
                    "sectorsPerTrack": le_u32(&out, 16),
                    "bytesPerSector": le_u32(&out, 20),
                })),
                Ok(IoControl::GetDeviceNumber) if out.len() == DeviceNumber::SIZE => Some(json!({
                    "deviceType": le_u32(&out, 0),
                    "deviceNumber": le_u32(&out, 4),
                    "partitionNumber": le_u32(&out, 8),
                })),
                _ => None,
            };
            let hex: String = out.iter().map(|b| format!("{:02x}", b)).collect();
            if as_json {
                json!({ "status": 0, "information": out.len(), "data": hex, "decoded": decoded })
                    .to_string()
            } else {
                match decoded {
                    Some(value) => format!("{} bytes: {}\n{}", out.len(), hex, value),
                    None => format!("{} bytes: {}", out.len(), hex),
                }
            }
        }
        Err(e) => report_error(&e, as_json),
    }
}

/// Little-endian u32 at `offset`.
fn le_u32(buf: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_le_bytes(word)
}

fn report_error(e: &DriveError, as_json: bool) -> String {
    if as_json {
        json!({ "status": e.status() as u32, "error": e.to_string() }).to_string()
    } else {
        format!("error {:#010x}: {}", e.status() as u32, e)
    }
}

fn attach(mgr: &mut Manager, udi: &str, device: &Path, mount: Option<&Path>, drive_type: DriveType, as_json: bool) -> String {
    match mgr.attach(udi, device, mount, drive_type) {
        Ok(letter) if as_json => json!({ "udi": udi, "letter": letter.to_string() }).to_string(),
        Ok(letter) => format!("{} -> {}", udi, letter),
        Err(e) => report_error(&e, as_json),
    }
}

/// One line of session input.
fn run_session_line(mgr: &mut Manager, line: &str, as_json: bool) -> Option<String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let reply = match words.as_slice() {
        [] => return None,
        ["list"] => list_drives(mgr, as_json),
        ["attach", udi, device, rest @ ..] => {
            let drive_type = match rest.first().map(|t| t.parse::<DriveType>()) {
                None => DriveType::Fixed,
                Some(Ok(t)) => t,
                Some(Err(e)) => return Some(report_error(&e, as_json)),
            };
            let mount = rest.get(1).map(Path::new);
            attach(mgr, udi, Path::new(device), mount, drive_type, as_json)
        }
        ["detach", udi] => {
            let found = mgr.detach(udi);
            if as_json {
                json!({ "udi": udi, "found": found }).to_string()
            } else if found {
                format!("{} removed", udi)
            } else {
                format!("{} not found", udi)
            }
        }
        ["query", name, request, rest @ ..] => {
            let len = rest.first().and_then(|l| l.parse().ok()).unwrap_or(64);
            match parse_request(request) {
                Ok(code) => query(mgr, name, code, len, as_json),
                Err(e) => e,
            }
        }
        _ => "commands: list | attach UDI DEVICE [TYPE [MOUNT]] | detach UDI | query NAME REQUEST [LEN]"
            .to_string(),
    };
    Some(reply)
}

fn print_change(change: &VolumeChange, as_json: bool) {
    if as_json {
        if let Ok(text) = serde_json::to_string(change) {
            println!("{}", text);
        }
    } else if let Some(letter) = change.letter() {
        println!("* {} {:?} (code {:#06x})", letter, change.event, change.event.code());
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if args.trace {
        logger.filter_level(LevelFilter::Trace);
    }
    logger.init();

    let config = match (&args.prefix, &args.config) {
        (Some(prefix), _) => MountManagerConfig::new(prefix),
        (None, Some(path)) => MountManagerConfig::load(path)?,
        (None, None) => MountManagerConfig::from_env(),
    };
    log::debug!("using prefix {}", config.prefix.display());

    let (change_tx, change_rx) = mpsc::channel::<VolumeChange>();
    let as_json = args.json;

    // Notifications are printed from their own thread as they arrive
    let printer = std::thread::spawn(move || {
        for change in change_rx {
            print_change(&change, as_json);
        }
    });

    let mgr: Manager = MountManager::from_config(&config, ChannelNotifier::new(change_tx))?;
    let result = run_command(mgr, args.command, as_json).await;

    // The manager is gone, so the notification channel is closed
    let _ = printer.join();
    result
}

async fn run_command(mut mgr: Manager, command: Command, as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::List => println!("{}", list_drives(&mgr, as_json)),
        Command::Attach {
            udi,
            device,
            mount,
            drive_type,
        } => println!("{}", attach(&mut mgr, &udi, &device, mount.as_deref(), drive_type, as_json)),
        Command::Query { name, request, len } => {
            let code = parse_request(&request)?;
            println!("{}", query(&mgr, &name, code, len, as_json));
        }
        Command::Session => run_session(mgr, as_json).await?,
    }
    Ok(())
}

/// Serve stdin commands. The manager lives on a single blocking task and
/// handles requests one at a time.
async fn run_session(mgr: Manager, as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (req_tx, mut req_rx) = tokio_mpsc::channel::<(String, oneshot::Sender<Option<String>>)>(16);

    let actor = tokio::task::spawn_blocking(move || {
        let mut mgr = mgr;
        while let Some((line, reply_tx)) = req_rx.blocking_recv() {
            let _ = reply_tx.send(run_session_line(&mut mgr, &line, as_json));
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed == "quit" || trimmed == "exit" {
            break;
        }
        let (reply_tx, reply_rx) = oneshot::channel();
        if req_tx.send((trimmed.to_string(), reply_tx)).await.is_err() {
            break; // Actor gone
        }
        if let Ok(Some(reply)) = reply_rx.await {
            println!("{}", reply);
        }
    }

    drop(req_tx);
    actor.await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request() {
        assert_eq!(parse_request("geometry"), Ok(0x0007_0000));
        assert_eq!(parse_request("DEVNUM"), Ok(0x002D_1080));
        assert_eq!(parse_request("toc"), Ok(0x0002_4000));
        assert_eq!(parse_request("0x10"), Ok(16));
        assert_eq!(parse_request("42"), Ok(42));
        assert!(parse_request("bogus").is_err());
    }

    #[test]
    fn test_le_u32() {
        let buf = [0, 0x10, 0x27, 0, 0, 0x0b, 0, 0, 0];
        assert_eq!(le_u32(&buf, 1), 10000);
        assert_eq!(le_u32(&buf, 5), 11);
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "mountmgr", "--prefix", "/tmp/p", "attach", "usb", "/dev/sdb1", "--type", "cdrom",
        ])
        .unwrap();
        match args.command {
            Command::Attach { drive_type, .. } => assert_eq!(drive_type, DriveType::Cdrom),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
