/// Device class derived from a browser user agent string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceInfo {
    pub is_mobile: bool,
    pub is_ios: bool,
    pub is_android: bool,
    pub is_desktop: bool,
}

const MOBILE_MARKERS: &[&str] = &[
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
];

const IOS_MARKERS: &[&str] = &["iPad", "iPhone", "iPod"];

impl DeviceInfo {
    pub fn from_user_agent(user_agent: &str) -> Self {
        let lower = user_agent.to_ascii_lowercase();
        let is_mobile = MOBILE_MARKERS.iter().any(|m| lower.contains(m));
        let is_ios = IOS_MARKERS.iter().any(|m| user_agent.contains(m));
        let is_android = user_agent.contains("Android");
        Self {
            is_mobile,
            is_ios,
            is_android,
            is_desktop: !is_mobile,
        }
    }
}
