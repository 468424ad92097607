//! Sign-in message for off-chain memo access.

use crate::types::{Address, MemoId};

/// Build the message a wallet signs to prove it may read a memo.
///
/// The address is rendered lowercase, so the same wallet always signs the
/// same bytes regardless of how its address was typed.
pub fn access_message(memo_id: &MemoId, address: &Address) -> String {
    format!("Tempo Memo Access\nMemo: {}\nAddress: {}", memo_id, address)
}
