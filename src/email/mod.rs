pub mod clients;

use self::clients::Message;

/// Compose the message that delivers a verification code.
pub fn verification_code_message(to: &str, code: &str, ttl_minutes: i64) -> Message {
    Message {
        to: to.to_owned(),
        subject: "Your Exchange verification code".to_owned(),
        text: format!(
            "Hi,\n\n\
             Your verification code is: {}\n\
             This code expires in {} minutes.\n\n\
             If you did not request this, you can ignore this email.",
            code, ttl_minutes
        ),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn verification_message_contains_code_and_lifetime() {
        let message = verification_code_message("alice@uni.edu", "042042", 10);

        assert_eq!("alice@uni.edu", message.to);
        assert!(message.text.contains("042042"));
        assert!(message.text.contains("10 minutes"));
    }
}
