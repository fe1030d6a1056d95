mod credential_test;
mod helpers;
mod session_test;
