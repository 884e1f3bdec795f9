mod codes;

pub use codes::{generate_otp, generate_order_number, generate_pickup_otps, is_well_formed_otp, OTP_LENGTH};
