//! Pure page arithmetic and the widget-identifier codec. Nothing in here touches
//! Discord or a store.

pub(crate) mod codec;
pub(crate) mod pager;

pub(crate) use codec::NavAction;
pub(crate) use pager::{page_window, paginate, Page};
