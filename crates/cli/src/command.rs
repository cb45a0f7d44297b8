//! REPL command grammar.

use std::str::FromStr;

pub const HELP: &str = "\
touch | drag | hover          stroke / drag with button / hover
say <text>                    final speech result
hear <text>                   interim speech result
smile <left> <right> [jaw]    blend-shape frame
face <width> <height>         landmark frame from mouth size
noface                        frame without a face
pet <id>                      select pet
status | pets | help | /q";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Touch,
    Drag,
    Hover,
    Say(String),
    Hear(String),
    Smile { left: f32, right: f32, jaw: Option<f32> },
    Face { width: f32, height: f32 },
    NoFace,
    Pet(String),
    Status,
    Pets,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        match verb {
            "touch" => Ok(Self::Touch),
            "drag" => Ok(Self::Drag),
            "hover" => Ok(Self::Hover),
            "say" | "hear" if rest.is_empty() => Err(format!("usage: {verb} <text>")),
            "say" => Ok(Self::Say(rest.to_string())),
            "hear" => Ok(Self::Hear(rest.to_string())),
            "smile" => {
                let nums = numbers(rest)?;
                match nums[..] {
                    [left, right] => Ok(Self::Smile { left, right, jaw: None }),
                    [left, right, jaw] => Ok(Self::Smile { left, right, jaw: Some(jaw) }),
                    _ => Err("usage: smile <left> <right> [jaw]".into()),
                }
            }
            "face" => match numbers(rest)?[..] {
                [width, height] => Ok(Self::Face { width, height }),
                _ => Err("usage: face <width> <height>".into()),
            },
            "noface" => Ok(Self::NoFace),
            "pet" if rest.is_empty() => Err("usage: pet <id>".into()),
            "pet" => Ok(Self::Pet(rest.to_string())),
            "status" => Ok(Self::Status),
            "pets" => Ok(Self::Pets),
            "help" | "?" => Ok(Self::Help),
            "/q" | "/quit" | "/exit" => Ok(Self::Quit),
            other => Err(format!("unknown command: {other} (try `help`)")),
        }
    }
}

fn numbers(args: &str) -> Result<Vec<f32>, String> {
    args.split_whitespace()
        .map(|a| a.parse::<f32>().map_err(|_| format!("not a number: {a}")))
        .collect()
}
