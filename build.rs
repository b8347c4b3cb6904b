fn main() {
    // ESP-IDF sysenv is only meaningful when building the firmware image;
    // host builds (tests, fuzzing) skip it.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
