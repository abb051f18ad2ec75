use anyhow::Result;
use smallsh::{Interpreter, signals};

fn main() -> Result<()> {
    signals::install()?;
    Interpreter::new().repl()
}
