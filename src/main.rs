fn main() {
    env_logger::init();
    if let Err(err) = lantern::run() {
        log::error!("application error: {err:?}");
        std::process::exit(1);
    }
}
