// 🧩 Command Grammar
// Splits one input line into a command word and its arguments.
//
//   canonical:  update Place 1234 name "Loft"
//   dotted:     Place.update("1234", {"name": "Loft"})
//
// Argument words follow shell quoting rules, except that a `{...}` (or else
// `[...]`) span is kept as one opaque trailing word.

// ============================================================================
// COMMANDS
// ============================================================================

/// The six store commands, reachable in both spellings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Create,
    Show,
    Destroy,
    All,
    Count,
    Update,
}

impl Verb {
    pub const ALL: [Verb; 6] = [
        Verb::Create,
        Verb::Show,
        Verb::Destroy,
        Verb::All,
        Verb::Count,
        Verb::Update,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Verb::Create => "create",
            Verb::Show => "show",
            Verb::Destroy => "destroy",
            Verb::All => "all",
            Verb::Count => "count",
            Verb::Update => "update",
        }
    }

    pub fn from_name(name: &str) -> Option<Verb> {
        Verb::ALL.into_iter().find(|verb| verb.name() == name)
    }

    /// Text printed by `help <command>`
    pub fn usage(&self) -> &'static str {
        match self {
            Verb::Create => "Usage: create <class> or <class>.create()\n\
                Create a new instance of a class and print its id.",
            Verb::Show => "Usage: show <class> <id> or <class>.show(<id>)\n\
                Display the string representation of a class instance given its id.",
            Verb::Destroy => "Usage: destroy <class> <id> or <class>.destroy(<id>)\n\
                Delete a class instance given its id.",
            Verb::All => "Usage: all or all <class> or <class>.all()\n\
                Display string representations of all instances of a given class.\n\
                If no class is specified, displays all instantiated objects.",
            Verb::Count => "Usage: count <class> or <class>.count()\n\
                Retrieve the number of instances of a given class.",
            Verb::Update => "Usage: update <class> <id> <attribute_name> <attribute_value> or\n       \
                <class>.update(<id>, <attribute_name>, <attribute_value>) or\n       \
                <class>.update(<id>, <dictionary>)\n\
                Update a class instance of a given id by adding or updating\n\
                a given attribute key/value pair or dictionary.",
        }
    }
}

// ============================================================================
// LINE SPLITTING
// ============================================================================

/// Split a trimmed line into its leading command word and the rest.
///
/// The command word is the leading run of `[A-Za-z0-9_]`; a leading `?`
/// means `help`.
pub fn split_command(line: &str) -> (&str, &str) {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix('?') {
        return ("help", rest.trim());
    }

    let end = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(line.len());
    (&line[..end], line[end..].trim())
}

/// Rewrite `Class.command(args)` into the command and `"Class args"`.
///
/// Returns `None` when the line is not in dotted form or names no command.
pub fn rewrite_dotted(line: &str) -> Option<(Verb, String)> {
    let dot = line.find('.')?;
    let (class_name, rest) = (&line[..dot], &line[dot + 1..]);

    let open = rest.find('(')?;
    let close = rest[open..].find(')')? + open;
    let verb = Verb::from_name(&rest[..open])?;
    let args = &rest[open + 1..close];

    Some((verb, format!("{} {}", class_name, args)))
}

// ============================================================================
// TOKENIZING
// ============================================================================

/// Quote opened but never closed, or a trailing lone backslash
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unbalanced quotes or trailing escape")]
pub struct UnbalancedQuotes;

/// Tokenize a command's argument string.
///
/// Words are stripped of surrounding commas. If the string holds a `{...}`
/// span (or, failing that, a `[...]` span) only the text before it is split
/// and the span becomes the last word; anything after it is dropped.
pub fn parse_args(arg: &str) -> Result<Vec<String>, UnbalancedQuotes> {
    let span = find_span(arg, '{', '}').or_else(|| find_span(arg, '[', ']'));

    match span {
        None => Ok(strip_commas(split_words(arg)?)),
        Some((start, end)) => {
            let mut words = strip_commas(split_words(&arg[..start])?);
            words.push(arg[start..end].to_string());
            Ok(words)
        }
    }
}

/// True if a word is a brace-delimited literal
pub fn is_dict_literal(word: &str) -> bool {
    word.starts_with('{') && word.ends_with('}')
}

/// First `open` up to the nearest following `close`, inclusive
fn find_span(arg: &str, open: char, close: char) -> Option<(usize, usize)> {
    let start = arg.find(open)?;
    let end = arg[start..].find(close)? + start + close.len_utf8();
    Some((start, end))
}

fn strip_commas(words: Vec<String>) -> Vec<String> {
    words
        .into_iter()
        .map(|word| word.trim_matches(',').to_string())
        .collect()
}

/// POSIX shell-style word splitting.
///
/// Single quotes are literal. Inside double quotes a backslash escapes only
/// `"` and `\`. Outside quotes a backslash escapes any character. Adjacent
/// quoted and bare pieces join into one word.
pub fn split_words(input: &str) -> Result<Vec<String>, UnbalancedQuotes> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err(UnbalancedQuotes),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\')) => current.push(c),
                            Some(c) => {
                                current.push('\\');
                                current.push(c);
                            }
                            None => return Err(UnbalancedQuotes),
                        },
                        Some(c) => current.push(c),
                        None => return Err(UnbalancedQuotes),
                    }
                }
            }
            '\\' => {
                in_word = true;
                current.push(chars.next().ok_or(UnbalancedQuotes)?);
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        words.push(current);
    }
    Ok(words)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn words(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_words_plain() {
        assert_eq!(
            split_words("BaseModel 1234-1234-1234").unwrap(),
            words(&["BaseModel", "1234-1234-1234"])
        );
        assert_eq!(split_words("   ").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_split_words_quotes() {
        assert_eq!(
            split_words(r#"City 1 name "San Jose""#).unwrap(),
            words(&["City", "1", "name", "San Jose"])
        );
        assert_eq!(
            split_words(r#"a 'it"s' "say \"hi\"" b\ c"#).unwrap(),
            words(&["a", "it\"s", "say \"hi\"", "b c"])
        );
        assert_eq!(split_words(r#"x"y z"w"#).unwrap(), words(&["xy zw"]));
        assert_eq!(split_words(r#""""#).unwrap(), words(&[""]));
    }

    #[test]
    fn test_split_words_unbalanced() {
        assert_eq!(split_words("name \"open"), Err(UnbalancedQuotes));
        assert_eq!(split_words("name 'open"), Err(UnbalancedQuotes));
        assert_eq!(split_words("trailing\\"), Err(UnbalancedQuotes));
    }

    #[test]
    fn test_parse_args_strips_commas() {
        assert_eq!(
            parse_args(r#"User "1234", "first_name", "Betty""#).unwrap(),
            words(&["User", "1234", "first_name", "Betty"])
        );
    }

    #[test]
    fn test_parse_args_keeps_dict_opaque() {
        let args = parse_args(r#"Place "1234", {"max_guest": "4", "name": "Loft"}"#).unwrap();
        assert_eq!(
            args,
            words(&["Place", "1234", r#"{"max_guest": "4", "name": "Loft"}"#])
        );
        assert!(is_dict_literal(&args[2]));
    }

    #[test]
    fn test_parse_args_keeps_list_opaque() {
        let args = parse_args(r#"Place 1 amenity_ids ["a", "b"]"#).unwrap();
        assert_eq!(args, words(&["Place", "1", "amenity_ids", r#"["a", "b"]"#]));
        assert!(!is_dict_literal(&args[3]));
    }

    #[test]
    fn test_parse_args_drops_text_after_span() {
        let args = parse_args("Place 1 {'a': 1} trailing words").unwrap();
        assert_eq!(args, words(&["Place", "1", "{'a': 1}"]));
    }

    #[test]
    fn test_split_command() {
        assert_eq!(split_command("create State"), ("create", "State"));
        assert_eq!(split_command("  all  "), ("all", ""));
        assert_eq!(split_command("State.count()"), ("State", ".count()"));
        assert_eq!(split_command("? update"), ("help", "update"));
        assert_eq!(split_command("{oops}"), ("", "{oops}"));
    }

    #[test]
    fn test_rewrite_dotted() {
        assert_eq!(
            rewrite_dotted("User.count()"),
            Some((Verb::Count, "User ".to_string()))
        );
        assert_eq!(
            rewrite_dotted(r#"User.show("1234")"#),
            Some((Verb::Show, r#"User "1234""#.to_string()))
        );
        assert_eq!(
            rewrite_dotted(r#"Place.update("1", {"name": "Loft"})"#),
            Some((Verb::Update, r#"Place "1", {"name": "Loft"}"#.to_string()))
        );
        assert_eq!(rewrite_dotted("User.fly()"), None);
        assert_eq!(rewrite_dotted("User.count"), None);
        assert_eq!(rewrite_dotted("hello world"), None);
    }

    #[test]
    fn test_verb_names() {
        for verb in Verb::ALL {
            assert_eq!(Verb::from_name(verb.name()), Some(verb));
            assert!(verb.usage().starts_with("Usage:"));
        }
        assert_eq!(Verb::from_name("quit"), None);
    }
}
