use colored::Colorize;
use std::env;

pub struct Prompt {
    user: String,
    prefix: String,
}

impl Prompt {
    pub fn new() -> Self {
        Self {
            user: whoami::username(),
            prefix: String::from("hsh>"),
        }
    }

    pub fn get_string(&self) -> String {
        let cwd = env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| String::from("?"));

        format!(
            "{}:{} {} ",
            self.user.green(),
            cwd.blue(),
            self.prefix.bold()
        )
    }
}
