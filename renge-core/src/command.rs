//! デバッガコマンド

/// デバッガコマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// ブレークポイントを設定 ("メソッド名:行")
    Break(String),
    /// 発火済みブレークポイントを再アーム ("メソッド名:行")
    Rearm(String),
    /// ブレークポイント一覧表示
    InfoBreak,
    /// メソッドを実行 (メソッド名)
    Run(String),
    /// メソッドを逆アセンブル表示 (メソッド名)
    Disasm(String),
    /// メソッド一覧表示
    Methods,
    /// ヘルプ表示
    Help,
    /// 終了
    Quit,
}

impl Command {
    /// コマンド文字列をパースする
    pub fn parse(input: &str) -> Option<Self> {
        let parts: Vec<&str> = input.trim().split_whitespace().collect();
        if parts.is_empty() {
            return None;
        }

        match parts[0] {
            "break" | "b" => {
                if parts.len() > 1 {
                    Some(Command::Break(parts[1].to_string()))
                } else {
                    None
                }
            }
            "rearm" => {
                if parts.len() > 1 {
                    Some(Command::Rearm(parts[1].to_string()))
                } else {
                    None
                }
            }
            "info" => {
                if parts.len() > 1 && (parts[1] == "break" || parts[1] == "b") {
                    Some(Command::InfoBreak)
                } else {
                    None
                }
            }
            "run" | "r" => {
                if parts.len() > 1 {
                    Some(Command::Run(parts[1].to_string()))
                } else {
                    None
                }
            }
            "disasm" | "d" => {
                if parts.len() > 1 {
                    Some(Command::Disasm(parts[1].to_string()))
                } else {
                    None
                }
            }
            "methods" | "m" => Some(Command::Methods),
            "help" | "h" | "?" => Some(Command::Help),
            "quit" | "q" | "exit" => Some(Command::Quit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("break countdown:2"),
            Some(Command::Break("countdown:2".to_string()))
        );
        assert_eq!(
            Command::parse("b countdown:2"),
            Some(Command::Break("countdown:2".to_string()))
        );
        assert_eq!(Command::parse("info break"), Some(Command::InfoBreak));
        assert_eq!(
            Command::parse("run countdown"),
            Some(Command::Run("countdown".to_string()))
        );
        assert_eq!(Command::parse("quit"), Some(Command::Quit));
        assert_eq!(Command::parse("break"), None);
        assert_eq!(Command::parse("bogus"), None);
    }
}
