use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use std::sync::{Mutex, PoisonError};

/// Blocks the calling flow until answered. A disabled session answers
/// every question with its default.
pub trait ReviewSession: Send + Sync {
    fn enabled(&self) -> bool;

    fn confirm(&self, prompt: &str, default: bool) -> bool;

    /// Returns the index into `choices` that was picked.
    fn choose(&self, prompt: &str, choices: &[String], default: usize) -> usize;

    fn prompt(&self, label: &str, default: &str) -> String;

    /// Displays a message to the reviewer.
    fn show(&self, _message: &str) {}
}

/// Session used for unattended runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractive;

impl ReviewSession for NonInteractive {
    fn enabled(&self) -> bool {
        false
    }

    fn confirm(&self, _prompt: &str, default: bool) -> bool {
        default
    }

    fn choose(&self, _prompt: &str, _choices: &[String], default: usize) -> usize {
        default
    }

    fn prompt(&self, _label: &str, default: &str) -> String {
        default.to_string()
    }
}

/// Line-oriented session over any reader/writer pair.
///
/// End of input answers every outstanding question with its default, so a
/// closed stdin can never hang a run.
pub struct ConsoleSession<R, W> {
    io: Mutex<(R, W)>,
}

impl ConsoleSession<BufReader<Stdin>, Stdout> {
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead + Send, W: Write + Send> ConsoleSession<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }

    pub fn into_parts(self) -> (R, W) {
        self.io.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes `text` and reads one trimmed line; `None` on end of input.
    fn ask(&self, text: &str) -> Option<String> {
        let mut guard = self.io.lock().unwrap_or_else(PoisonError::into_inner);
        let (reader, writer) = &mut *guard;

        if let Err(e) = write!(writer, "{text}").and_then(|()| writer.flush()) {
            tracing::warn!("Review output failed: {}", e);
        }

        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim().to_string()),
            Err(e) => {
                tracing::warn!("Review input failed: {}", e);
                None
            }
        }
    }

    fn say(&self, message: &str) {
        let mut guard = self.io.lock().unwrap_or_else(PoisonError::into_inner);
        let (_, writer) = &mut *guard;

        if let Err(e) = writeln!(writer, "{message}") {
            tracing::warn!("Review output failed: {}", e);
        }
    }
}

impl<R: BufRead + Send, W: Write + Send> ReviewSession for ConsoleSession<R, W> {
    fn enabled(&self) -> bool {
        true
    }

    fn confirm(&self, prompt: &str, default: bool) -> bool {
        let hint = if default { "Y/n" } else { "y/N" };

        loop {
            let Some(answer) = self.ask(&format!("{prompt} [{hint}] ")) else {
                return default;
            };

            match answer.to_lowercase().as_str() {
                "" => return default,
                "y" | "yes" => return true,
                "n" | "no" => return false,
                _ => self.say("Please answer y or n."),
            }
        }
    }

    fn choose(&self, prompt: &str, choices: &[String], default: usize) -> usize {
        if choices.is_empty() {
            return default;
        }

        self.say(prompt);
        for (i, choice) in choices.iter().enumerate() {
            self.say(&format!("  {}. {}", i + 1, choice));
        }

        loop {
            let Some(answer) = self.ask(&format!("Choice [{}]: ", default + 1)) else {
                return default;
            };

            if answer.is_empty() {
                return default;
            }

            match answer.parse::<usize>() {
                Ok(n) if (1..=choices.len()).contains(&n) => return n - 1,
                _ => self.say(&format!("Enter a number between 1 and {}.", choices.len())),
            }
        }
    }

    fn prompt(&self, label: &str, default: &str) -> String {
        let text = if default.is_empty() {
            format!("{label}: ")
        } else {
            format!("{label} [{default}]: ")
        };

        match self.ask(&text) {
            Some(answer) if !answer.is_empty() => answer,
            _ => default.to_string(),
        }
    }

    fn show(&self, message: &str) {
        self.say(message);
    }
}
