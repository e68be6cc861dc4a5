use std::io::{self, IsTerminal, Write};
use std::process::{Command, Stdio};

/// Print `output`, paging it through `$PAGER` when it is taller than the terminal.
pub fn print_with_pager(output: &str) -> io::Result<()> {
    if !io::stdout().is_terminal() {
        println!("{output}");
        return Ok(());
    }

    let (_, term_height) = crossterm::terminal::size().unwrap_or((80, 24));
    if output.lines().count() <= term_height as usize {
        println!("{output}");
        return Ok(());
    }

    let pager = std::env::var("PAGER")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "less -R".into());
    let mut parts = pager.split_whitespace();
    let cmd = parts.next().unwrap_or("less");

    let Ok(mut child) = Command::new(cmd)
        .args(parts)
        .stdin(Stdio::piped())
        .spawn()
    else {
        println!("{output}");
        return Ok(());
    };

    if let Some(mut stdin) = child.stdin.take() {
        // pager quit early
        let _ = writeln!(stdin, "{output}");
    }
    child.wait()?;
    Ok(())
}
