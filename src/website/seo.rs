use std::borrow::Cow;

/// Page level data every template needs for the `<head>` and the navigation.
pub struct Meta<'a> {
    pub title: Cow<'a, str>,
    pub authenticated: bool,
}

impl<'a> Meta<'a> {
    pub fn new(title: impl Into<Cow<'a, str>>) -> Self {
        Self {
            title: title.into(),
            authenticated: false,
        }
    }

    pub fn authenticated(title: impl Into<Cow<'a, str>>) -> Self {
        Self {
            title: title.into(),
            authenticated: true,
        }
    }
}
