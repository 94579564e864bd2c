mod install_tests;
mod verify_tests;
