//! yasql - compile YAML playbooks to SQL.

fn main() -> std::process::ExitCode {
    yasql::cmd::main()
}
