//! PII masking helpers shared by the inbound pipeline, the outbound batch
//! processor, and anything that logs a recipient or an error message.
//!
//! Mirrors `fc-secrets::SecretService::mask_reference`'s "show a safe prefix,
//! hide the rest" approach, adapted to phone numbers and free-text error
//! messages instead of secret references.

/// Mask a recipient identifier for logging.
///
/// Phone numbers (runs of 5+ digits, optionally prefixed with `+`) are
/// reduced to `***` plus their last 4 digits. Anything else (opaque
/// platform handles, usernames) is not a phone number and is never logged
/// verbatim: it comes back as a fixed `***`.
pub fn mask_recipient(recipient: &str) -> String {
    let digits: String = recipient.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() >= 5 && digits.len() == recipient.trim_start_matches('+').len() {
        let last4 = &digits[digits.len() - 4..];
        format!("***{last4}")
    } else {
        "***".to_string()
    }
}

/// Sanitize a free-text error message before it is attached to a log line
/// or a result record: truncate to 200 characters and replace any run of 4
/// or more digits with `***` to defeat accidental phone-number leakage.
pub fn sanitize_error_message(message: &str) -> String {
    let truncated: String = message.chars().take(200).collect();
    mask_digit_runs(&truncated)
}

fn mask_digit_runs(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut run = String::new();

    let flush = |run: &mut String, output: &mut String| {
        if run.len() >= 4 {
            output.push_str("***");
        } else {
            output.push_str(run);
        }
        run.clear();
    };

    for c in input.chars() {
        if c.is_ascii_digit() {
            run.push(c);
        } else {
            flush(&mut run, &mut output);
            output.push(c);
        }
    }
    flush(&mut run, &mut output);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_phone_number_to_last_four() {
        assert_eq!(mask_recipient("+15551234567"), "***4567");
        assert_eq!(mask_recipient("15551234567"), "***4567");
    }

    #[test]
    fn masks_opaque_handle_entirely() {
        assert_eq!(mask_recipient("ig-handle-xyz"), "***");
    }

    #[test]
    fn short_digit_strings_are_not_treated_as_phone_numbers() {
        assert_eq!(mask_recipient("1234"), "***");
    }

    #[test]
    fn sanitizes_and_truncates_error_messages() {
        let msg = "failed to deliver to 5551234567: timeout";
        assert_eq!(sanitize_error_message(msg), "failed to deliver to ***: timeout");
    }

    #[test]
    fn truncates_long_messages() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_error_message(&long).len(), 200);
    }

    #[test]
    fn leaves_short_digit_runs_alone() {
        assert_eq!(sanitize_error_message("retry 3 of 5"), "retry 3 of 5");
    }
}
