mod tokenizer_tests;
