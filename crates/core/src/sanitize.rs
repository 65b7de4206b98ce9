//! Character-class filter applied to every value that reaches a child process.
//!
//! Disallowed characters are dropped, not rejected: `a;b` becomes `ab`. The
//! relay launches programs with an argv vector and never through a shell, so
//! the filter is a second line of defence rather than the only one.

/// Punctuation allowed in addition to ASCII letters and digits.
const ALLOWED_PUNCTUATION: &[char] = &['.', '_', ':', ' ', '"', '/', '-'];

pub fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || ALLOWED_PUNCTUATION.contains(&c)
}

/// Return `input` with every character outside the vocabulary removed.
pub fn sanitize(input: &str) -> String {
    input.chars().filter(|c| is_allowed(*c)).collect()
}

/// Sanitize each argument independently.
pub fn sanitize_all<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    args.iter().map(|arg| sanitize(arg.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabulary_strings_are_fixed_points() {
        let samples = [
            "ping -i 0.01 -c 4 -W 1 10.0.0.1",
            "sudo vtysh -c \"show ipv6 route fd00::1/64\"",
            "dig example.dn42 AAAA",
            "Under_Score-dash.dot:colon/slash",
            "",
        ];
        for sample in samples {
            assert_eq!(sanitize(sample), sample);
            assert_eq!(sanitize(&sanitize(sample)), sample);
        }
    }

    #[test]
    fn shell_metacharacters_are_dropped_in_place() {
        assert_eq!(sanitize("1.1.1.1; rm -rf /"), "1.1.1.1 rm -rf /");
        assert_eq!(sanitize("a|b&c`d`$e(f)"), "abcdef");
        assert_eq!(sanitize("host\n--help"), "host--help");
        assert_eq!(sanitize("$(reboot)"), "reboot");
    }

    #[test]
    fn relative_order_is_preserved() {
        let input = "z;y|x&w";
        let output = sanitize(input);
        assert_eq!(output, "zyxw");
        let kept: String = input.chars().filter(|c| c.is_ascii_alphabetic()).collect();
        assert_eq!(output, kept);
    }

    #[test]
    fn non_ascii_letters_are_removed() {
        assert_eq!(sanitize("bücher.de"), "bcher.de");
        assert_eq!(sanitize("例え.jp"), ".jp");
    }

    #[test]
    fn sanitize_all_filters_each_argument() {
        let args = vec!["10.0.0.1".to_string(), "80;id".to_string()];
        assert_eq!(sanitize_all(&args), vec!["10.0.0.1", "80id"]);
    }
}
