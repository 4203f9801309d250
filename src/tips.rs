// Tip of the day - a recurring alarm, an HTTP feed, and one stored value

mod refresher;
mod source;


pub use refresher::{Bootstrap, TIP_ALARM, TIP_KEY, TipRefresher, bootstrap};
pub use source::{HttpTipSource, StaticTips, TipError, TipSource};
