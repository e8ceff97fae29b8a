use dataflow::NetworkError;
use dataflow::run;

fn main() -> Result<(), NetworkError> {
    env_logger::init();
    run(std::env::args().collect())
}
