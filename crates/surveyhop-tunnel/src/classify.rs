//! Output line classification for the tunnel process.

/// What one line of tunnel output means for the connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// The tunnel is up.
    Connected,
    /// The process is prompting for credentials interactively.
    AuthRequired,
    /// Progress, warnings, noise.
    Other,
}

/// Substrings that mark a successful connection. OpenVPN prints the first
/// on its log stream, the second on the management/status channel.
const CONNECTED_SIGNATURES: &[&str] =
    &["Initialization Sequence Completed", "CONNECTED,SUCCESS"];

/// Substrings that mark an interactive credential prompt.
const AUTH_PROMPTS: &[&str] = &["Enter Auth Username", "Need 'Auth' username/password"];

/// Classify one line of merged stdout/stderr output.
pub fn classify(line: &str) -> LineClass {
    if CONNECTED_SIGNATURES.iter().any(|sig| line.contains(sig)) {
        LineClass::Connected
    } else if AUTH_PROMPTS.iter().any(|sig| line.contains(sig)) {
        LineClass::AuthRequired
    } else {
        LineClass::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_signature_with_timestamp_prefix() {
        let line = "2025-06-01 12:00:03 Initialization Sequence Completed";
        assert_eq!(classify(line), LineClass::Connected);
    }

    #[test]
    fn test_status_channel_signature() {
        let line = "1717243203,CONNECTED,SUCCESS,10.8.0.6,185.220.101.4";
        assert_eq!(classify(line), LineClass::Connected);
    }

    #[test]
    fn test_auth_prompt() {
        assert_eq!(classify("Enter Auth Username:"), LineClass::AuthRequired);
        assert_eq!(
            classify("Need 'Auth' username/password"),
            LineClass::AuthRequired
        );
    }

    #[test]
    fn test_progress_lines_are_other() {
        assert_eq!(
            classify("TCP/UDP: Preserving recently used remote address"),
            LineClass::Other
        );
        assert_eq!(classify(""), LineClass::Other);
    }
}
