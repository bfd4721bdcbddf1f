use log::debug;

use forksh::shell::Shell;
use forksh::utils::config::Config;
use forksh::utils::log::init_logger;
use forksh::utils::theme::Theme;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::new();
    init_logger(&config)?;
    debug!("配置加载成功, shell 名: {}", config.name);
    let theme = Theme::load_theme(&config.theme);

    let mut shell = Shell::new(&config, &theme)?;
    shell.run()
}
