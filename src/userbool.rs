use std::str::FromStr;

/// A yes/no answer typed at a prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UserBool {
    pub value: bool,
}

impl From<bool> for UserBool {
    fn from(value: bool) -> Self {
        UserBool { value }
    }
}

impl From<UserBool> for bool {
    fn from(val: UserBool) -> Self {
        val.value
    }
}

impl FromStr for UserBool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "n" | "no" | "false" => Ok(false.into()),
            "y" | "yes" | "true" => Ok(true.into()),
            other => Err(format!("Cannot understand {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn understands_common_answers() {
        assert_eq!("Y".parse::<UserBool>(), Ok(true.into()));
        assert_eq!(" yes ".parse::<UserBool>(), Ok(true.into()));
        assert_eq!("No".parse::<UserBool>(), Ok(false.into()));
        assert!("maybe".parse::<UserBool>().is_err());
    }
}
