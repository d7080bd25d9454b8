use anyhow::anyhow;
use log::LevelFilter;
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use syslog::{BasicLogger, Facility, Formatter3164};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Terminal,
    Syslog,
}

pub fn init(target: LogTarget, level: LevelFilter) -> anyhow::Result<()> {
    match target {
        LogTarget::Terminal => {
            TermLogger::init(level, simplelog::Config::default(), TerminalMode::Mixed, ColorChoice::Auto)?;
        }
        LogTarget::Syslog => {
            let formatter = Formatter3164 {
                facility: Facility::LOG_USER,
                hostname: None,
                process: "watch2putio".into(),
                pid: std::process::id(),
            };
            let logger = syslog::unix(formatter).map_err(|e| anyhow!("could not connect to syslog: {e}"))?;
            log::set_boxed_logger(Box::new(BasicLogger::new(logger))).map(|()| log::set_max_level(level))?;
        }
    }
    Ok(())
}
