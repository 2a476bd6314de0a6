// ABOUTME: Config command implementation.
// ABOUTME: Prints the configuration after destination overrides are applied.

use shipyard::config::Config;
use shipyard::error::Result;
use shipyard::output::Output;

pub fn show_config(config: &Config, output: &Output) -> Result<()> {
    let yaml = config.to_yaml()?;
    output.record(yaml.trim_end(), config);
    Ok(())
}
