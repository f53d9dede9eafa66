fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if handle_cli_flags() {
        return;
    }

    if let Err(err) = tweet_feed::app::run(std::env::args().skip(1)) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn handle_cli_flags() -> bool {
    let mut saw_flag = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("tweet-feed {}", tweet_feed::VERSION);
                saw_flag = true;
            }
            "--help" | "-h" => {
                println!("{}", tweet_feed::app::USAGE);
                saw_flag = true;
            }
            _ => {}
        }
    }
    saw_flag
}
