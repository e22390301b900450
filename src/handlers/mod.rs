// Two security tiers: public routes live in main.rs (no auth), everything
// under /api/* goes through the session middleware, and /api/admin/* adds
// the admin guard on top.
pub mod protected;
