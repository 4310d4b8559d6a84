//! Black-box flow-control tests against `Connection::send_data` / `receive`,
//! complementing the window-arithmetic unit tests already in `src/flow.rs`.
