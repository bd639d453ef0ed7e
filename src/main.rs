//! Theme Agent - 主题安装与状态映射代理
//!
//! Usage:
//! - Normal mode: `theme-agent`
//! - With custom port: `theme-agent --port 9090`
//! - With custom data dir: `theme-agent --data-dir /var/lib/theme-agent`

use std::path::PathBuf;

use theme_agent::RuntimeConfig;

/// 解析命令行参数
fn parse_args() -> RuntimeConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = RuntimeConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" if i + 1 < args.len() => {
                config.port_override = args[i + 1].parse().ok();
                i += 2;
            }
            "--data-dir" if i + 1 < args.len() => {
                config.data_dir_override = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    config
}

fn print_help() {
    println!("Theme Agent - 主题安装与状态映射代理");
    println!();
    println!("USAGE:");
    println!("    theme-agent [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --port <PORT>        Override the listening port");
    println!("    --data-dir <DIR>     Override the data directory");
    println!("    -h, --help           Print help information");
    println!();
    println!("EXAMPLES:");
    println!("    theme-agent                              # Normal mode");
    println!("    theme-agent --port 9090                  # Custom port");
    println!("    theme-agent --data-dir /var/lib/themes   # Custom data dir");
}

fn main() {
    let config = parse_args();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    if let Err(e) = rt.block_on(theme_agent::init_and_run(config)) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
