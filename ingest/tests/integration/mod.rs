mod pipeline_test;
mod supervisor_test;
