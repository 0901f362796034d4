use anyhow::Result;

fn main() -> Result<()> {
    threatspec_cli::main_entry()
}
