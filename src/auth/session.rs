use tower_cookies::cookie::{time, SameSite};
use tower_cookies::{Cookie, Cookies};

pub const SESSION_COOKIE: &str = "auth";

/// Cookie attributes shared by login, registration and logout.
#[derive(Debug, Clone, Copy)]
pub struct SessionCookie {
    pub secure: bool,
    pub max_age_secs: i64,
}

impl SessionCookie {
    fn build(&self, value: String, max_age_secs: i64) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(time::Duration::seconds(max_age_secs))
            .build()
    }

    pub fn set(&self, cookies: &Cookies, token: String) {
        cookies.add(self.build(token, self.max_age_secs));
    }

    pub fn clear(&self, cookies: &Cookies) {
        cookies.add(self.build(String::new(), 0));
    }
}
