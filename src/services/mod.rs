pub mod bookings;
pub mod cards;
pub mod points;
pub mod queue;
pub mod reconciler;
pub mod topup;
pub mod vouchers;
pub mod wallet;

pub use bookings::BookingService;
pub use cards::{run_card_maintenance, CardService};
pub use points::PointsService;
pub use queue::QueueService;
pub use reconciler::run_reconciler;
pub use topup::TopupService;
pub use vouchers::VoucherService;
pub use wallet::WalletService;

use rand::Rng;

/// Random A-Z0-9 code for vouchers, bookings and queue tickets.
pub(crate) fn generate_code(len: usize) -> String {
    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char)
        .collect()
}
