use menva::read_default_file;
use taskboard::WebsiteConfig;

fn main() -> std::io::Result<()> {
    read_default_file();
    let config = WebsiteConfig::from_env_with_prefix("TASKBOARD_");
    config.print();
    taskboard::run(config)
}
